//! Streams Fortuna output on stdout. With no flags the stream is
//! infinite; `--bytes-total` caps it at a fixed amount. For piping into
//! statistical test suites.
use clap::{value_parser, Arg, Command};
use fortuna_csprng::Fortuna;
use std::io::{stdout, Write};

pub fn main() {
    let matches = Command::new(
        "Generate a stream of random bytes, specify no flags for infinite generation",
    )
    .arg(
        Arg::new("bytes_total")
            .short('b')
            .long("bytes-total")
            .value_parser(value_parser!(usize))
            .help("Total number of bytes that has to be generated"),
    )
    .get_matches();

    let mut seed = [0u8; 128];
    getrandom::getrandom(&mut seed).expect("failed to gather the initial seed");
    let fortuna = Fortuna::new(&seed).expect("128 byte seed meets the minimum");

    let stdout = stdout();
    // Lock stdout once, a single thread is writing.
    let mut stdout = stdout.lock();
    let mut buffer = [0u8; 4096];

    match matches.get_one::<usize>("bytes_total") {
        Some(&total) => {
            let mut produced = 0;
            while produced < total {
                let chunk = (total - produced).min(buffer.len());
                let n = fortuna.read(&mut buffer[..chunk]);
                stdout.write_all(&buffer[..n]).expect("stdout closed");
                produced += n;
            }
        }
        None => loop {
            let n = fortuna.read(&mut buffer);
            if stdout.write_all(&buffer[..n]).is_err() {
                break;
            }
        },
    }
}
