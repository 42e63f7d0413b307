pub mod ask;
pub mod fund;
pub mod search;
pub mod ui;
