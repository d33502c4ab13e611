//! vershelf - build documentation for every version of a repository.

fn main() {
    std::process::exit(vershelf::cli::run());
}
