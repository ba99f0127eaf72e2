#![no_std]
#![allow(dead_code)]

extern crate alloc;

pub mod ftl;
