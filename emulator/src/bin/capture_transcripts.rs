use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

#[allow(dead_code)]
#[path = "../sim.rs"]
mod sim;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    for profile in TranscriptProfile::ALL {
        record_profile(profile)?;
    }
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::scripted(profile, io::sink())?;
    session.run()?;
    println!("captured {} -> {}", profile.tag(), profile.log_path());
    Ok(())
}
