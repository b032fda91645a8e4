// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate mandeltiles;
extern crate num;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use mandeltiles::config::default_workers;
use mandeltiles::{
    logging, pan_region, selection_to_region, Canvas, Config, Mandelbrot, Rect, ScreenPoint,
    TileManager,
};
use num::Complex;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn parse_selection(s: &str) -> Option<(ScreenPoint, ScreenPoint)> {
    let fields: Vec<i32> = s
        .split(',')
        .map(i32::from_str)
        .collect::<Result<_, _>>()
        .ok()?;
    match fields[..] {
        [x1, y1, x2, y2] => Some((ScreenPoint::new(x1, y1), ScreenPoint::new(x2, y2))),
        _ => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const WORKERS: &str = "workers";
const DIVISOR: &str = "divisor";
const ITERATIONS: &str = "iterations";
const ZOOM: &str = "zoom";
const PAN: &str = "pan";
const MAX_FRAMES: &str = "max-frames";
const VERBOSE: &str = "verbose";

const FRAME_PAUSE: Duration = Duration::from_millis(1);

fn args<'a>() -> ArgMatches<'a> {
    let max_workers = num_cpus::get().max(1) * 4;

    App::new("mandeltiles")
        .version("0.1.0")
        .about("Progressive tiled Mandelbrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; the format follows the extension"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("512x512")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .required(false)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .default_value("-1.5,-1.5")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Left lower corner of the region to show"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .required(false)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .default_value("1.5,1.5")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Right upper corner of the region to show"),
        )
        .arg(
            Arg::with_name(WORKERS)
                .required(false)
                .long(WORKERS)
                .short("w")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        max_workers,
                        "Could not parse worker count",
                        &format!("Worker count must be between 1 and {}", max_workers),
                    )
                })
                .help("Number of render threads [default: one less than the CPU count]"),
        )
        .arg(
            Arg::with_name(DIVISOR)
                .required(false)
                .long(DIVISOR)
                .short("d")
                .takes_value(true)
                .default_value("8")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        64,
                        "Could not parse tile divisor",
                        "Tile divisor must be between 1 and 64",
                    )
                })
                .help("Tiles along each side of the screen"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("1024")
                .validator(|s| {
                    validate_range(
                        &s,
                        16,
                        200_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 16 and 200000",
                    )
                })
                .help("Escape-time iteration limit"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .required(false)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .validator(|s| match parse_selection(&s) {
                    Some(_) => Ok(()),
                    None => Err("Could not parse zoom selection".to_string()),
                })
                .help("Select x1,y1,x2,y2 on screen and zoom into it before panning"),
        )
        .arg(
            Arg::with_name(PAN)
                .required(false)
                .long(PAN)
                .short("p")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .allow_hyphen_values(true)
                .validator(|s| validate_pair::<i32>(&s, ',', "Could not parse pan offset"))
                .help("Drag the image by dx,dy pixels once the previous view is finished"),
        )
        .arg(
            Arg::with_name(MAX_FRAMES)
                .required(false)
                .long(MAX_FRAMES)
                .takes_value(true)
                .default_value("100000")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse frame limit",
                        "Frame limit must be at least 1",
                    )
                })
                .help("Give up on a view after this many frames"),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .short("v")
                .multiple(true)
                .help("More logging; repeat for more"),
        )
        .get_matches()
}

/// Runs frames until every tile is final or the frame limit is hit.
fn settle(
    tiles: &mut TileManager,
    canvas: &mut Canvas,
    max_frames: usize,
) -> mandeltiles::Result<usize> {
    for frame in 1..=max_frames {
        tiles.update();
        tiles.draw(canvas)?;
        if tiles.is_complete() {
            return Ok(frame);
        }
        thread::sleep(FRAME_PAUSE);
    }
    warn!(max_frames, "view did not finish within the frame limit");
    Ok(max_frames)
}

fn run(matches: &ArgMatches) -> mandeltiles::Result<()> {
    let image_size: (u16, u16) =
        parse_pair(matches.value_of(SIZE).unwrap(), 'x').expect("Error parsing image dimensions");
    let leftlower = parse_complex(matches.value_of(LEFTLOWER).unwrap())
        .expect("Error parsing left lower point");
    let rightupper = parse_complex(matches.value_of(RIGHTUPPER).unwrap())
        .expect("Error parsing right upper point");
    let workers = matches
        .value_of(WORKERS)
        .map(|s| usize::from_str(s).expect("Could not parse worker count"))
        .unwrap_or_else(default_workers);
    let divisor =
        u32::from_str(matches.value_of(DIVISOR).unwrap()).expect("Could not parse tile divisor");
    let iterations = usize::from_str(matches.value_of(ITERATIONS).unwrap())
        .expect("Could not parse iteration count");
    let max_frames = usize::from_str(matches.value_of(MAX_FRAMES).unwrap())
        .expect("Could not parse frame limit");
    let pans: Vec<(i32, i32)> = matches
        .values_of(PAN)
        .map(|values| values.filter_map(|v| parse_pair(v, ',')).collect())
        .unwrap_or_default();

    let config = Config {
        workers,
        divisor,
        iterations,
        width: u32::from(image_size.0),
        height: u32::from(image_size.1),
        ..Config::default()
    };
    let region = Rect::from_corners(leftlower, rightupper)?;

    let engine = Arc::new(Mandelbrot::new(config.iterations));
    let mut canvas = Canvas::new(config.width, config.height);
    let mut tiles = TileManager::new(config, engine)?;

    let shown = tiles.zoom_request(region)?;
    info!(?shown, "initial view");
    let frames = settle(&mut tiles, &mut canvas, max_frames)?;
    info!(frames, stats = ?tiles.stats(), "initial view finished");

    let screen = (tiles.config().width, tiles.config().height);
    let home = tiles.config().home;
    if let Some((start, end)) = matches.value_of(ZOOM).and_then(parse_selection) {
        match selection_to_region(start, end, screen, tiles.region()) {
            Some(selected) => {
                let shown = tiles.zoom_request(selected)?;
                let frames = settle(&mut tiles, &mut canvas, max_frames)?;
                info!(?shown, frames, "selection finished");
            }
            None => warn!("empty zoom selection; ignored"),
        }
    }

    let center = ScreenPoint::new((screen.0 / 2) as i32, (screen.1 / 2) as i32);
    for (dx, dy) in pans {
        let target = ScreenPoint::new(center.x + dx, center.y + dy);
        let moved = pan_region(tiles.region(), center, target, screen, home);
        if moved == tiles.region() {
            warn!(dx, dy, "pan would leave the home region; ignored");
            continue;
        }
        tiles.move_request(moved)?;
        let frames = settle(&mut tiles, &mut canvas, max_frames)?;
        info!(dx, dy, frames, stats = ?tiles.stats(), "pan finished");
    }

    canvas.save(matches.value_of(OUTPUT).unwrap())
}

fn main() {
    let matches = args();
    logging::init(matches.occurrences_of(VERBOSE));

    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
