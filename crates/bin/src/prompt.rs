//! Stdin-backed implementation of the guided-mode prompter.

use std::io::{self, BufRead, Write};

use colored::Colorize;
use hermes_graph::{Prompter, SendChoice};

pub struct StdinPrompter;

impl StdinPrompter {
    fn read_line(&self) -> Option<String> {
        print!("  {} ", ">".cyan());
        io::stdout().flush().ok()?;
        let mut line = String::new();
        // EOF aborts the prompt, an empty line re-lists the options
        if io::stdin().lock().read_line(&mut line).ok()? == 0 {
            return None
        }
        Some(line.trim().to_string())
    }
}

impl Prompter for StdinPrompter {
    fn choose_scope(&mut self, candidates: &[&str]) -> Option<String> {
        if candidates.is_empty() {
            eprintln!("no matching scopes");
            return None
        }
        println!("Select a starting scope:");
        for candidate in candidates {
            println!("  {candidate}");
        }
        loop {
            let input = self.read_line()?;
            if candidates.contains(&input.as_str()) {
                return Some(input)
            }
            // echo near-matches the way a typo deserves
            let near: Vec<_> =
                candidates.iter().filter(|c| c.contains(input.as_str())).collect();
            if let [only] = near.as_slice() {
                return Some(only.to_string())
            }
            println!("no exact match, candidates:");
            for candidate in near {
                println!("  {candidate}");
            }
        }
    }

    fn choose_send(&mut self, choices: &[SendChoice<'_>]) -> Option<usize> {
        println!("Choose a message dispatch by line number:");
        for choice in choices {
            match choice.line {
                Some(line) => println!("  Line: {line} - {}", choice.carried_type),
                None => println!("  Line: ? - {}", choice.carried_type),
            }
        }
        loop {
            let input = self.read_line()?;
            let Ok(line) = input.parse::<u32>() else {
                println!("enter one of the listed line numbers");
                continue
            };
            if let Some(index) = choices.iter().position(|c| c.line == Some(line)) {
                return Some(index)
            }
            println!("no dispatch at line {line}");
        }
    }

    fn choose_instance(&mut self) -> Option<i64> {
        println!("No statically known message value. Enter one to guide the walk, or press enter to explore every branch:");
        let input = self.read_line()?;
        input.parse().ok()
    }
}
