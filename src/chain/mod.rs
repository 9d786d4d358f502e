// Chain-facing collaborators: decoded state reads and pre-built calls
pub mod calls;
pub mod reader;
pub mod retry;
pub mod snapshot;
pub mod types;
pub mod view;

pub use calls::{BatchMode, Call, ProxyType, VotePayload};
pub use reader::ChainStateReader;
pub use retry::RetryPolicy;
pub use snapshot::{ChainSnapshot, SnapshotReader};
pub use view::ChainView;
