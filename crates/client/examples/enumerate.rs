//! Enumerates the instances of a class and prints their paths.
//!
//! ```text
//! WBEM_URL=https://server:5989 WBEM_USER=op WBEM_PASSWORD=pw \
//!     cargo run --example enumerate -- CIM_ComputerSystem
//! ```

use std::time::Duration;
use wbem_client::{ConnectionConfig, EnumerateOptions, Error, OpenOptions, WbemConnection};

fn main() -> Result<(), Error> {
    env_logger::init();

    let url = std::env::var("WBEM_URL").unwrap_or_else(|_| "http://localhost:5988".to_string());
    let classname = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "CIM_ComputerSystem".to_string());

    let mut config = ConnectionConfig::new(url)?
        .with_timeout(Duration::from_secs(30))
        .with_no_verification(std::env::var_os("WBEM_NO_VERIFY").is_some());
    if let (Ok(user), Ok(password)) = (
        std::env::var("WBEM_USER"),
        std::env::var("WBEM_PASSWORD"),
    ) {
        config = config.with_credentials(user, password);
    }
    let conn = WbemConnection::connect(config)?;

    futures_lite::future::block_on(async {
        let mut instances = conn
            .iter_enumerate_instances(
                &classname,
                None,
                &EnumerateOptions::default(),
                &OpenOptions::default(),
                100,
            )
            .await?;
        let mut count = 0usize;
        while let Some(instance) = instances.next().await {
            let instance = instance?;
            match &instance.path {
                Some(path) => println!("{path}"),
                None => println!("{}", instance.classname),
            }
            count += 1;
        }
        eprintln!("{count} instances of {classname}");
        Ok(())
    })
}
