//! 命令定义和实现

pub mod config;
pub mod motion;
pub mod plane;
pub mod position;
pub mod procedure;
pub mod sequence;
pub mod status;

pub use config::ConfigCommand;
pub use motion::{JogCommand, MoveCommand};
pub use plane::PlaneCommand;
pub use position::PositionCommand;
pub use procedure::ProcedureCommand;
pub use sequence::{JiggleCommand, PlayCommand, RecordCommand};
pub use status::StatusCommand;
