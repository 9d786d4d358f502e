pub mod sender;
pub mod signer;
pub mod transport;

pub use sender::{Sender, SubmissionReport};
pub use signer::Signer;
pub use transport::{DryRunTransport, Transport, TxStatus};
