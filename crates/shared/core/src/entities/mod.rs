mod equity;
mod position;
mod side;

pub use equity::Equity;
pub use position::Position;
pub use side::Side;
