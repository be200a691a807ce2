use serde::Serialize;

use crate::errors::RequestError;

/// Splits `count` records into pages of `per_page`. An empty result still has
/// one (empty) page.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: i64,
    per_page: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub has_other_pages: bool,
    pub next_page_number: Option<i64>,
    pub previous_page_number: Option<i64>,
    pub page_range: Vec<i64>,
    #[serde(skip)]
    pub offset: i64,
    #[serde(skip)]
    pub limit: i64,
}

impl Paginator {
    pub fn new(count: i64, per_page: i64) -> Self {
        Self {
            count: count.max(0),
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> i64 {
        if self.count == 0 {
            1
        } else {
            (self.count + self.per_page - 1) / self.per_page
        }
    }

    /// Lookup used by list pages: no parameter means the first page, `last` the
    /// final one, and anything unparsable or out of range is not found.
    pub fn page(&self, requested: Option<&str>) -> Result<Page, RequestError> {
        let number = match requested.map(str::trim) {
            None | Some("") => 1,
            Some("last") => self.num_pages(),
            Some(value) => value.parse::<i64>().map_err(|_| RequestError::NotFound)?,
        };
        if number < 1 || number > self.num_pages() {
            return Err(RequestError::NotFound);
        }
        Ok(self.build(number))
    }

    /// Forgiving lookup: garbage falls back to the first page and numbers past
    /// the end clamp to the last page.
    pub fn get_page(&self, requested: Option<&str>) -> Page {
        let number = requested
            .and_then(|value| value.trim().parse::<i64>().ok())
            .unwrap_or(1);
        let number = if number < 1 {
            1
        } else {
            number.min(self.num_pages())
        };
        self.build(number)
    }

    fn build(&self, number: i64) -> Page {
        let num_pages = self.num_pages();
        Page {
            number,
            num_pages,
            count: self.count,
            has_next: number < num_pages,
            has_previous: number > 1,
            has_other_pages: num_pages > 1,
            next_page_number: (number < num_pages).then_some(number + 1),
            previous_page_number: (number > 1).then_some(number - 1),
            page_range: (1..=num_pages).collect(),
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }
}
