// Components module - reusable UI building blocks drawn by the views

pub mod scrollbar;
pub mod toast;
