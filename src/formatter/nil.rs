use crate::formatter::Formatter;

/// Suppresses all output. Useful for validating a dump or timing a parse.
#[derive(Copy, Clone, Default)]
pub struct Nil;

impl Nil {
    pub fn new() -> Nil {
        Nil
    }
}

impl Formatter for Nil {}
