//! HTTP request handlers

pub mod pages;
pub mod upload;
