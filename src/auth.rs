mod oauth;
mod token;

pub use oauth::{AuthSession, ConsoleSession};
pub use token::Token;
