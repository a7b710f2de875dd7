// src/utils/mod.rs

pub mod csrf;
pub mod hash;
pub mod html;
pub mod jwt;
pub mod urls;
pub mod upload;
