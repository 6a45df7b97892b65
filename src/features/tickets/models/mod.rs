mod ticket;
mod ticket_completion;
mod user_ticket;

pub use ticket::{CreateTicket, Priority, Ticket, TicketListItem, TicketStatus, UpdateTicket};
pub use ticket_completion::{CreateTicketCompletion, TicketCompletion};
pub use user_ticket::Assignee;
