//! Campus Dialogue Hub library.
//!
//! A college discussion forum: students and teachers sign in with a magic
//! link, post questions tagged by course, semester and subject, comment and
//! vote, while teachers run a rota of student moderators who are alerted to
//! posts nobody has answered.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod forum;
pub mod storage;
pub mod vocab;
pub mod web;
