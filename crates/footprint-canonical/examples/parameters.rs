use footprint_canonical::{hash_hex_from_object, parameter, NonKey};

parameter! {
    module = "demo";
    #[derive(Debug, Clone)]
    pub struct Simulation {
        pub steps: u32,
        pub dt: f64,
        pub seed: Option<u64>,
    }
}

fn main() {
    let sim = Simulation {
        steps: 1_000,
        dt: 0.01,
        seed: None,
        non_key: NonKey::new(),
    }
    .with_info("owner", "demo run");

    println!("{sim}");
    match hash_hex_from_object(&sim) {
        Ok(hash) => println!("footprint sha-256: {hash}"),
        Err(err) => {
            eprintln!("encoding failed: {}", err);
            std::process::exit(1);
        }
    }
}
