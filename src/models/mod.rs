pub mod category;
pub mod de;
pub mod intent;
pub mod inventory;
pub mod seat;
pub mod ticket;

pub use category::Category;
pub use intent::ToggleIntent;
pub use inventory::Inventory;
pub use seat::SeatKey;
pub use ticket::{Ticket, TicketId};
