use std::collections::VecDeque;

use num_bigint::BigInt;

use crate::interpreter::{Input, Log, Output};

#[derive(Default)]
pub struct QueueInput {
    pub queue: VecDeque<char>,
}

impl QueueInput {
    pub fn new(text: &str) -> Self {
        Self {
            queue: text.chars().collect(),
        }
    }
}

impl Input for QueueInput {
    fn take(&mut self) -> Result<Option<char>, String> {
        Ok(self.queue.pop_front())
    }
}

/// Collects program output exactly as it would appear on stdout.
#[derive(Default)]
pub struct StringOutput {
    pub text: String,
}

impl Output for StringOutput {
    fn send_int(&mut self, val: &BigInt) {
        self.text.push_str(&val.to_string());
    }

    fn send_char(&mut self, ch: char) {
        self.text.push(ch);
    }
}

#[derive(Default)]
pub struct VecLog {
    pub messages: Vec<String>,
}

impl Log for VecLog {
    fn log(&mut self, msg: String) {
        self.messages.push(msg);
    }
}

pub struct NoLog;

impl Log for NoLog {
    fn log(&mut self, _msg: String) {}
}
