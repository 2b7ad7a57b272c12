const HERMES_BANNER: &str = r"
  _
 | |__   ___ _ __ _ __ ___   ___  ___
 | '_ \ / _ \ '__| '_ ` _ \ / _ \/ __|
 | | | |  __/ |  | | | | | |  __/\__ \
 |_| |_|\___|_|  |_| |_| |_|\___||___/

 message-graph analysis for channel-based programs
";

pub fn print_banner() {
    println!("{HERMES_BANNER}");
}
