pub mod board;
pub mod record;

pub use board::{send_response, AssignmentBoard, LoadTicket, Outcome, RemovalPolicy, Taken};
pub use record::{AssignmentRecord, ResponseStatus};
