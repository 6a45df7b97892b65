mod category;

pub use category::HelpDeskCategory;
