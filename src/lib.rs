// Copyright (c) by Ildeberto de los Santos Ruiz
//MIT License
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
pub mod config;
pub mod derivation;
pub mod error;
pub mod server;
pub mod symbolic;
