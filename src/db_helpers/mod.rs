mod article_helpers;
mod category_helpers;
mod user_helpers;

pub use article_helpers::*;
pub use category_helpers::*;
pub use user_helpers::*;

/// Collects `column = $n` assignments for the optional values that are present.
#[derive(Default)]
struct SetClause {
    assignments: Vec<String>,
    params: Vec<String>,
}

impl SetClause {
    fn set(mut self, column: &str, value: Option<String>) -> Self {
        if let Some(value) = value {
            self.params.push(value);
            self.assignments
                .push(format!("{} = ${}", column, self.params.len()));
        }
        self
    }

    /// The assignments in call order and the values to bind, `$1` first.
    fn build(self) -> (Vec<String>, Vec<String>) {
        (self.assignments, self.params)
    }
}
