use appointed::command::{self, Global};
use appointed::{Config, Dependencies, Service};
use std::error::Error;
use structopt::StructOpt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let command = Global::from_args();
    let config = Config::load("appointed")?;
    let dependencies = Dependencies::new(&config)?;
    let service = Service::new(&config, dependencies.database)?;

    match command::execute(command, service).await {
        Ok(output) => println!("{}", output),
        Err(error) => eprintln!("{}", error),
    };

    Ok(())
}
