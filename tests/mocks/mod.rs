#![allow(dead_code)]

pub mod platform;
pub mod rewriter;
