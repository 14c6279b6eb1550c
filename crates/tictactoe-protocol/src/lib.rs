pub mod board;
pub mod codec;
pub mod command;
pub mod composite;
pub mod event;
pub mod parser;
pub mod validation;

pub use board::parse_board;
pub use codec::{InboundFrame, LineCodec};
pub use command::Command;
pub use composite::decode_composite;
pub use event::ProtocolEvent;
pub use parser::decode_line;
pub use validation::validate_field;
