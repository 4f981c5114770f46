//! Well-Known Text (WKT 1) parser and encoder for CRS definitions.
//!
//! The parser is a recursive descent over bracketed elements keyed on the
//! leading keyword (`GEOGCS`, `PROJCS`, `DATUM`, ...). The encoder is the
//! structural inverse: deterministic keyword order and shortest
//! round-tripping float formatting, so decode -> encode -> decode loses
//! nothing the model keeps.

mod encode;
mod parse;
mod token;

pub use encode::encode;
pub use parse::parse;
