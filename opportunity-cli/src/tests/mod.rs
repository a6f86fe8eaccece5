//! Shared test harness modules for the opportunity CLI.

use super::*;

mod commands;
mod helpers;
