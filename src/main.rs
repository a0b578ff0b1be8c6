mod bytecode;
mod frontend;
mod lang;
mod runtime;

use std::{env, fs, path::Path, process};

use crate::bytecode::compile::Compiler;
use crate::bytecode::disasm::print_disasm;
use crate::frontend::lexer::Scanner;
use crate::frontend::parser::Parser;
use crate::frontend::token::Token;
use crate::runtime::vm::Vm;

fn main() {
    let args: Vec<String> = env::args().collect();

    let tokens_only = args.contains(&"--tokens".to_string());
    let ast_only = args.contains(&"--ast".to_string());
    let disasm_only = args.contains(&"--disasm".to_string());

    // Non-flag arguments are script paths; exactly one is accepted.
    let scripts: Vec<&String> = args.iter().skip(1).filter(|a| !a.starts_with('-')).collect();

    match scripts.as_slice() {
        [script] => {
            ensure_extension(script);
            match fs::read_to_string(script) {
                Ok(source) => run_script(&source, tokens_only, ast_only, disasm_only),
                Err(e) => {
                    eprintln!("Failed to read '{}': {}", script, e);
                    process::exit(1);
                }
            }
        }
        _ => print_usage(),
    }
}

fn ensure_extension(filename: &str) {
    let path = Path::new(filename);
    if path.extension().and_then(|e| e.to_str()) != Some("fl") {
        eprintln!("Error: expected a .fl file, got {}", filename);
        process::exit(1);
    }
}

fn run_script(source: &str, tokens_only: bool, ast_only: bool, disasm_only: bool) {
    let tokens = match Scanner::new(source).scan() {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("Scan error: {}", e);
            process::exit(1);
        }
    };

    if tokens_only {
        dump_tokens(&tokens);
        return;
    }

    let program = match Parser::new(tokens).parse() {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            process::exit(1);
        }
    };

    if ast_only {
        print!("{}", program.render());
        return;
    }

    let image = match Compiler::new().compile_program(&program) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Compile error: {}", e);
            process::exit(2);
        }
    };

    if disasm_only {
        print_disasm(&image);
        return;
    }

    let mut vm = match Vm::new(image) {
        Ok(vm) => vm,
        Err(e) => {
            eprintln!("Runtime error: {}", e);
            process::exit(2);
        }
    };

    if let Err(e) = vm.start() {
        eprintln!("Runtime error: {}", e);
        process::exit(2);
    }
}

fn dump_tokens(tokens: &[Token]) {
    for token in tokens {
        println!("{:4}  {:<14} {}", token.line, format!("{:?}", token.kind), token.lexeme);
    }
}

fn print_usage() {
    println!("FLINT - a small bytecode-compiled scripting language");
    println!();
    println!("Usage:");
    println!("  flint <file.fl>           Run a program");
    println!("  flint --tokens <file.fl>  Show the token stream only");
    println!("  flint --ast <file.fl>     Show the parsed program only");
    println!("  flint --disasm <file.fl>  Show the compiled bytecode only");
}
