pub use executor::Executor;
pub use predicate::{Expression, Predicate, Term};
pub use query_data::{AggField, Command, QueryData};
pub use translate_and_validate::{check_fits, TranslateAndValidate};
mod executor;
mod predicate;
mod query_data;
mod translate_and_validate;
