pub mod guest;
pub mod pages;
