use pulse_detector::local::{client, process_file, server};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "client" => client::run().unwrap(),
            "server" => server::run().unwrap(),
            "file" => process_file::run().unwrap(),
            _ => println!("Invalid argument, please use 'client', 'server' or 'file'"),
        }
    } else {
        println!("Please specify 'client', 'server' or 'file' as argument");
    }
}
