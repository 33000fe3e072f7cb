mod cell;
mod load;
mod table_row;
mod tabular;

pub use cell::*;
pub use load::*;
pub use table_row::*;
pub use tabular::*;

pub use crate::conversions::numeric::PgNumeric;
