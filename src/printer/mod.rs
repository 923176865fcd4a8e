//! Console echo for verbose sweeps.

use std::io::{self, Write};

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::command::Invocation;

#[derive(Debug, Clone, Copy)]
pub struct ProgressPrinter {
    pub enabled: bool,
    pub color: bool,
}

impl ProgressPrinter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            color: io::stdout().is_terminal(),
        }
    }

    pub fn start(&self, index: usize, total: usize, repetition: u32, invocation: &Invocation) {
        if !self.enabled {
            return;
        }
        let counter = format!("[{index}/{total}]");
        let rep = format!("#{repetition}");
        if self.color {
            print!("{} {} {}", counter.cyan(), rep.dimmed(), invocation.display_line());
        } else {
            print!("{} {} {}", counter, rep, invocation.display_line());
        }
        io::stdout().flush().ok();
    }

    pub fn measured(&self, value: &str) {
        if !self.enabled {
            return;
        }
        if self.color {
            println!(" -> {}", value.green());
        } else {
            println!(" -> {}", value);
        }
    }

    pub fn failed(&self, message: &str) {
        if !self.enabled {
            return;
        }
        if self.color {
            println!(" !! {}", message.red());
        } else {
            println!(" !! {}", message);
        }
    }

    pub fn interrupted(&self) {
        if self.enabled {
            println!(" (interrupted)");
        }
    }
}
