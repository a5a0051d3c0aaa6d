pub mod app;
pub mod catalog;
pub mod media;
pub mod model;
pub mod player;
pub mod playlist;
pub mod search;
pub mod share;
pub mod ui;
