use gantry_cli::App;
use gantry_core::Registry;

fn main() {
    let mut registry = Registry::new();
    if let Err(err) = petstore::register(&mut registry) {
        stdio::error("petstore", &err.to_string());
        std::process::exit(1);
    }

    gantry_cli::run(App {
        name: "PetStore",
        registry,
    });
}
