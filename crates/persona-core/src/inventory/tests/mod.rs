mod common;
mod selector;
