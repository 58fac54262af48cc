use std::{env, process};

use itertools::Itertools;
use reg_thompson::{compile_with_flags, lexer::tokenize, parser::parse, utils::CompileFlags};

fn main() {
    env_logger::init();

    let pattern = env::args().nth(1).unwrap_or_else(|| String::from("a(a|b)"));

    let tokens = match tokenize(&pattern) {
        Ok(tokens) => tokens,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };
    println!("tokens: {}", tokens.iter().map(|token| format!("{:?}", token.kind())).join(" "));

    match parse(&tokens) {
        Ok(rpn) => println!("rpn:    {}", rpn.iter().join(" ")),
        Err(err) => {
            eprintln!("{}", err.render(&pattern));
            process::exit(1);
        }
    }

    match compile_with_flags(&pattern, CompileFlags::DEBUG) {
        Ok(nfa) => print!("{}", nfa),
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
