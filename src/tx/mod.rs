//! Transaction pipeline: account resolution, submission and receipt polling

mod account;
mod receipt;
mod sender;

pub use account::AccountResolver;
pub use receipt::{PollPolicy, ReceiptAwaiter};
pub use sender::TransactionSender;
