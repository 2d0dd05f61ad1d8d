use std::process::exit;

use tree_lox::lox::Lox;

fn main() {
    exit(Lox::new().main());
}
