extern crate failure;
extern crate getopts;
extern crate lottery;
extern crate serde_json;
extern crate tracing;
extern crate tracing_subscriber;

use failure::{err_msg, format_err, Error};
use getopts::Options;
use std::env;
use std::process;
use tracing_subscriber::EnvFilter;

use lottery::{Lottery, SaveFile};

struct Config {
    help: bool,
    filename: String,
    seed: Option<u64>,
}

#[derive(Clone)]
enum Command {
    Usage,
    New(i64, i64),
    Sell(i64, String),
    SellRandom(String),
    Remove(i64),
    Draw,
    Unwin(i64),
    Comment(i64, String),
    Owner(i64, String),
    Status,
}

type Build = fn(&[String]) -> Result<Command, Error>;

enum Handler {
    None,
    Cmd(Command),
    /// argument names, how many are required, and the command builder
    Args(&'static [&'static str], usize, Build),
    Switch(Option<Command>, fn(&str) -> Handler),
}

impl Handler {
    fn parse_command(&self, args: &[String]) -> Result<Command, Error> {
        match self {
            Handler::None => Err(err_msg("unknown command")),
            Handler::Cmd(command) => {
                if args.is_empty() {
                    Ok(command.clone())
                } else {
                    Err(format_err!("unexpected argument: {}", args[0]))
                }
            }
            Handler::Args(names, required, f) => {
                if args.len() < *required {
                    Err(format_err!("missing argument: {}", names[args.len()]))
                } else if args.len() > names.len() {
                    Err(format_err!("unexpected argument: {}", args[names.len()]))
                } else {
                    f(args)
                }
            }
            Handler::Switch(default, f) => {
                if args.is_empty() {
                    if let Some(command) = default {
                        Ok(command.clone())
                    } else {
                        Err(err_msg("expected command"))
                    }
                } else {
                    match f(args[0].as_str()) {
                        Handler::None => Err(format_err!("unknown command: {}", args[0])),
                        handler => handler.parse_command(&args[1..]),
                    }
                }
            }
        }
    }
}

fn parse_number(s: &str) -> Result<i64, Error> {
    s.trim()
        .parse()
        .map_err(|_| format_err!("not a number: {}", s))
}

fn text_arg(args: &[String], index: usize) -> String {
    args.get(index).cloned().unwrap_or_default()
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [OPTIONS] COMMAND", program);
    print!("{}", opts.usage(&brief));
    println!("\nCommands:");
    println!("    new CEILING PRICE");
    println!("    sell NUMBER [OWNER]");
    println!("    sell-random [OWNER]");
    println!("    remove NUMBER");
    println!("    draw");
    println!("    unwin NUMBER");
    println!("    comment NUMBER [TEXT]");
    println!("    owner NUMBER [NAME]");
    println!("    status");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = main2() {
        eprintln!("{}", err);
        process::exit(1);
    }
}

fn main2() -> Result<(), Error> {
    let args: Vec<String> = env::args().collect();

    let mut opts = Options::new();
    opts.optflag("h", "help", "print help");
    opts.optopt("f", "file", "lottery filename [lottery.vplf]", "FILE");
    opts.optopt("s", "seed", "seed for random draws [from OS entropy]", "SEED");

    let matches = opts.parse(&args[1..])?;

    let help = matches.opt_present("h");
    let filename = match matches.opt_str("f") {
        None => format!("lottery.{}", lottery::file::EXTENSION),
        Some(f) => f,
    };
    let seed = match matches.opt_str("s") {
        None => None,
        Some(s) => Some(
            s.parse::<u64>()
                .map_err(|_| format_err!("invalid seed: {}", s))?,
        ),
    };
    let config = Config {
        help,
        filename,
        seed,
    };

    let handler = Handler::Switch(Some(Command::Usage), |cmd| match cmd {
        "new" => Handler::Args(&["ceiling", "price"], 2, |args| {
            Ok(Command::New(parse_number(&args[0])?, parse_number(&args[1])?))
        }),
        "sell" => Handler::Args(&["number", "owner"], 1, |args| {
            Ok(Command::Sell(parse_number(&args[0])?, text_arg(args, 1)))
        }),
        "sell-random" => Handler::Args(&["owner"], 0, |args| {
            Ok(Command::SellRandom(text_arg(args, 0)))
        }),
        "remove" => Handler::Args(&["number"], 1, |args| {
            Ok(Command::Remove(parse_number(&args[0])?))
        }),
        "draw" => Handler::Cmd(Command::Draw),
        "unwin" => Handler::Args(&["number"], 1, |args| {
            Ok(Command::Unwin(parse_number(&args[0])?))
        }),
        "comment" => Handler::Args(&["number", "text"], 1, |args| {
            Ok(Command::Comment(parse_number(&args[0])?, text_arg(args, 1)))
        }),
        "owner" => Handler::Args(&["number", "name"], 1, |args| {
            Ok(Command::Owner(parse_number(&args[0])?, text_arg(args, 1)))
        }),
        "status" => Handler::Cmd(Command::Status),
        _ => Handler::None,
    });

    let command = handler.parse_command(&matches.free)?;

    if config.help {
        print_usage(&args[0], &opts);
        return Ok(());
    }

    match command {
        Command::Usage => {
            print_usage(&args[0], &opts);
            Ok(())
        }
        Command::New(ceiling, price) => new_lottery(&config, ceiling, price),
        Command::Status => status(&config),
        command => update(&config, command),
    }
}

fn open(config: &Config) -> Result<Lottery, Error> {
    let lottery = Lottery::load(&config.filename)
        .map_err(|err| format_err!("cannot open {}: {}", config.filename, err))?;
    Ok(match config.seed {
        Some(seed) => lottery.with_seed(seed),
        None => lottery,
    })
}

fn new_lottery(config: &Config, ceiling: i64, price: i64) -> Result<(), Error> {
    let lottery = Lottery::new(ceiling, price)?;
    lottery.save(&config.filename)?;
    println!(
        "created lottery {} with numbers 1 - {} at price {}",
        config.filename, ceiling, price
    );
    Ok(())
}

fn status(config: &Config) -> Result<(), Error> {
    let lottery = open(config)?;
    println!("{}", serde_json::to_string_pretty(&lottery.summary())?);
    Ok(())
}

fn update(config: &Config, command: Command) -> Result<(), Error> {
    let mut lottery = open(config)?;
    match command {
        Command::Sell(number, owner) => {
            let number = lottery.sell(number, &owner)?.number;
            println!("sold lottery number {}", number);
        }
        Command::SellRandom(owner) => match lottery.sell_random(&owner) {
            Some(ticket) => println!("sold lottery number {}", ticket.number),
            None => return Err(err_msg("no more tickets available")),
        },
        Command::Remove(number) => match lottery.remove(number) {
            Some(ticket) => println!("removed ticket {}", ticket.number),
            None => return Err(format_err!("lottery number {} has not been sold", number)),
        },
        Command::Draw => match lottery.draw_winner() {
            Some(ticket) => println!(
                "winning number {} ({})",
                ticket.number,
                ticket.owner_name()
            ),
            None => return Err(err_msg("no tickets left to draw")),
        },
        Command::Unwin(number) => {
            if !lottery.remove_winner(number) {
                return Err(format_err!("lottery number {} is not a winner", number));
            }
            println!("lottery number {} is no longer a winner", number);
        }
        Command::Comment(number, text) => {
            if lottery.set_comment(number, &text).is_none() {
                return Err(format_err!("lottery number {} has not been sold", number));
            }
            println!("updated comment of ticket {}", number);
        }
        Command::Owner(number, name) => {
            if lottery.set_owner(number, &name).is_none() {
                return Err(format_err!("lottery number {} has not been sold", number));
            }
            println!("updated owner of ticket {}", number);
        }
        Command::Usage | Command::New(..) | Command::Status => {}
    }
    lottery.save(&config.filename)
}

// vi: ts=8 sts=4 et
