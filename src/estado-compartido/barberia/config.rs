//! Parámetros de la simulación y su lectura desde la línea de comandos.

use crate::requests::ServiceWeights;
use rand::Rng;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {name} ({value}): must be at least 1")]
    InvalidCount { name: &'static str, value: usize },

    #[error("invalid interval for {name} [{min},{max}]")]
    InvalidInterval { name: &'static str, min: u64, max: u64 },

    #[error("invalid probability for {name} ({value}): must be in [0,100]")]
    InvalidProbability { name: &'static str, value: u32 },

    #[error("invalid number of client benches ({benches}) for {seats} seats")]
    InvalidBenches { seats: usize, benches: usize },

    #[error("invalid time unit: must be greater than 0 ms")]
    InvalidTimeUnit,

    #[error("unknown option \"{0}\"")]
    UnknownOption(String),

    #[error("missing value for option {0}")]
    MissingValue(String),

    #[error("invalid value \"{value}\" for option {option}")]
    InvalidValue { option: String, value: String },
}

/// Intervalo cerrado [min, max] en unidades de tiempo (o en viajes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    pub min: u64,
    pub max: u64,
}

impl Interval {
    pub const fn new(min: u64, max: u64) -> Self {
        Interval { min, max }
    }

    pub fn range(&self) -> RangeInclusive<u64> {
        self.min..=self.max
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.range())
    }

    fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        if self.min < 1 || self.max < self.min {
            return Err(ConfigError::InvalidInterval { name, min: self.min, max: self.max });
        }
        Ok(())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.min, self.max)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShopConfig {
    pub num_barbers: usize,
    pub num_clients: usize,
    pub num_barber_chairs: usize,
    pub num_scissors: usize,
    pub num_combs: usize,
    pub num_razors: usize,
    pub num_washbasins: usize,
    pub num_client_bench_seats: usize,
    pub num_client_benches: usize,
    pub vitality_time_units: Interval,
    pub work_time_units: Interval,
    pub barber_shop_trips: Interval,
    pub outside_time_units: Interval,
    pub prob_haircut: u32,
    pub prob_wash_hair: u32,
    pub prob_shave: u32,
    pub time_unit: Duration,
}

impl Default for ShopConfig {
    fn default() -> Self {
        ShopConfig {
            num_barbers: 5,
            num_clients: 10,
            num_barber_chairs: 4,
            num_scissors: 3,
            num_combs: 2,
            num_razors: 1,
            num_washbasins: 2,
            num_client_bench_seats: 6,
            num_client_benches: 1,
            vitality_time_units: Interval::new(2, 6),
            work_time_units: Interval::new(3, 10),
            barber_shop_trips: Interval::new(1, 3),
            outside_time_units: Interval::new(5, 30),
            prob_haircut: 60,
            prob_wash_hair: 30,
            prob_shave: 20,
            time_unit: Duration::from_millis(10),
        }
    }
}

/// Resultado de leer los argumentos: o se corre la simulación o se pidió la ayuda.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Run(ShopConfig),
    Help,
}

impl ShopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("number of barbers", self.num_barbers),
            ("number of clients", self.num_clients),
            ("number of barber chairs", self.num_barber_chairs),
            ("number of scissors", self.num_scissors),
            ("number of combs", self.num_combs),
            ("number of razors", self.num_razors),
            ("number of washbasins", self.num_washbasins),
            ("number of client benches seats", self.num_client_bench_seats),
        ];
        for (name, value) in counts {
            if value < 1 {
                return Err(ConfigError::InvalidCount { name, value });
            }
        }
        if self.num_client_benches < 1 || self.num_client_benches > self.num_client_bench_seats {
            return Err(ConfigError::InvalidBenches {
                seats: self.num_client_bench_seats,
                benches: self.num_client_benches,
            });
        }
        self.vitality_time_units.validate("vitality time units")?;
        self.work_time_units.validate("work time units")?;
        self.barber_shop_trips.validate("barber shop trips")?;
        self.outside_time_units.validate("outside time units")?;
        let probabilities = [
            ("haircut", self.prob_haircut),
            ("wash hair", self.prob_wash_hair),
            ("shave", self.prob_shave),
        ];
        for (name, value) in probabilities {
            if value > 100 {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        if self.time_unit.is_zero() {
            return Err(ConfigError::InvalidTimeUnit);
        }
        Ok(())
    }

    pub fn weights(&self) -> ServiceWeights {
        ServiceWeights { haircut: self.prob_haircut, wash_hair: self.prob_wash_hair, shave: self.prob_shave }
    }

    /// Duración real de una cantidad de unidades de tiempo.
    pub fn units(&self, units: u64) -> Duration {
        self.time_unit.saturating_mul(units.min(u32::MAX as u64) as u32)
    }

    /// Lee las opciones de la línea de comandos (sin el nombre del ejecutable).
    pub fn from_args<I, S>(args: I) -> Result<Command, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = ShopConfig::default();
        let mut args = args.into_iter().map(Into::into);
        while let Some(option) = args.next() {
            if option == "-h" || option == "--help" {
                return Ok(Command::Help);
            }
            let mut value = || args.next().ok_or_else(|| ConfigError::MissingValue(option.clone()));
            match option.as_str() {
                "-b" | "--num-barbers" => config.num_barbers = parse_one(&option, &value()?)?,
                "-n" | "--num-clients" => config.num_clients = parse_one(&option, &value()?)?,
                "-c" | "--num-chairs" => config.num_barber_chairs = parse_one(&option, &value()?)?,
                "-t" | "--num-tools" => {
                    let [scissors, combs, razors] = parse_list::<usize, 3>(&option, &value()?)?;
                    config.num_scissors = scissors;
                    config.num_combs = combs;
                    config.num_razors = razors;
                }
                "-1" | "--num-basins" => config.num_washbasins = parse_one(&option, &value()?)?,
                "-2" | "--num-client-benches-seats" => {
                    let [seats, benches] = parse_list::<usize, 2>(&option, &value()?)?;
                    config.num_client_bench_seats = seats;
                    config.num_client_benches = benches;
                }
                "-3" | "--work-time-units" => config.work_time_units = parse_interval(&option, &value()?)?,
                "-4" | "--barber-shop-trips" => config.barber_shop_trips = parse_interval(&option, &value()?)?,
                "-5" | "--outside-time-units" => config.outside_time_units = parse_interval(&option, &value()?)?,
                "-p" | "--prob-requests" => {
                    let [haircut, wash_hair, shave] = parse_list::<u32, 3>(&option, &value()?)?;
                    config.prob_haircut = haircut;
                    config.prob_wash_hair = wash_hair;
                    config.prob_shave = shave;
                }
                "-v" | "--vitality-time-units" => config.vitality_time_units = parse_interval(&option, &value()?)?,
                "-u" | "--time-unit" => config.time_unit = Duration::from_millis(parse_one(&option, &value()?)?),
                _ => return Err(ConfigError::UnknownOption(option)),
            }
        }
        config.validate()?;
        Ok(Command::Run(config))
    }

    pub fn usage(program: &str) -> String {
        let defaults = ShopConfig::default();
        format!(
            "Usage: {program} [OPTION] ...\n\n\
             Options:\n\
             \x20 -h,--help                                   show this help\n\
             \x20 -b,--num-barbers <N>                        number of barbers (default is {})\n\
             \x20 -n,--num-clients <N>                        number of clients (default is {})\n\
             \x20 -c,--num-chairs <N>                         number of barber chairs (default is {})\n\
             \x20 -t,--num-tools <SCISSORS>,<COMBS>,<RAZORS>  amount of each tool (default is [{},{},{}])\n\
             \x20 -1,--num-basins <N>                         number of washbasins (default is {})\n\
             \x20 -2,--num-client-benches-seats <TOTAL>,<BENCHES>  client seats and benches (default is [{},{}])\n\
             \x20 -3,--work-time-units <MIN>,<MAX>            barber work time units (default is {})\n\
             \x20 -4,--barber-shop-trips <MIN>,<MAX>          trips to the barber shop per client (default is {})\n\
             \x20 -5,--outside-time-units <MIN>,<MAX>         client time units outside the shop (default is {})\n\
             \x20 -p,--prob-requests <HAIRCUT>,<WASH_HAIR>,<SHAVE>  request probabilities (default is [{},{},{}])\n\
             \x20 -v,--vitality-time-units <MIN>,<MAX>        barber/client speed of living (default is {})\n\
             \x20 -u,--time-unit <N>                          simulation time unit (default is {} ms)\n",
            defaults.num_barbers,
            defaults.num_clients,
            defaults.num_barber_chairs,
            defaults.num_scissors,
            defaults.num_combs,
            defaults.num_razors,
            defaults.num_washbasins,
            defaults.num_client_bench_seats,
            defaults.num_client_benches,
            defaults.work_time_units,
            defaults.barber_shop_trips,
            defaults.outside_time_units,
            defaults.prob_haircut,
            defaults.prob_wash_hair,
            defaults.prob_shave,
            defaults.vitality_time_units,
            defaults.time_unit.as_millis(),
        )
    }
}

fn parse_one<T: std::str::FromStr>(option: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue { option: option.to_string(), value: value.to_string() })
}

fn parse_list<T, const N: usize>(option: &str, value: &str) -> Result<[T; N], ConfigError>
where
    T: std::str::FromStr,
{
    let parsed: Vec<T> = value.split(',').map(|part| parse_one(option, part)).collect::<Result<_, _>>()?;
    parsed
        .try_into()
        .map_err(|_| ConfigError::InvalidValue { option: option.to_string(), value: value.to_string() })
}

fn parse_interval(option: &str, value: &str) -> Result<Interval, ConfigError> {
    let [min, max] = parse_list::<u64, 2>(option, value)?;
    Ok(Interval::new(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ShopConfig::default().validate(), Ok(()));
    }

    #[test]
    fn parses_short_and_long_options() {
        let command = ShopConfig::from_args([
            "-b", "2", "--num-clients", "4", "-t", "1,1,2", "-2", "8,2", "-3", "1,5", "-p", "80,10,10", "-u", "1",
        ])
        .unwrap();
        let Command::Run(config) = command else { panic!("expected a run command") };
        assert_eq!(config.num_barbers, 2);
        assert_eq!(config.num_clients, 4);
        assert_eq!((config.num_scissors, config.num_combs, config.num_razors), (1, 1, 2));
        assert_eq!((config.num_client_bench_seats, config.num_client_benches), (8, 2));
        assert_eq!(config.work_time_units, Interval::new(1, 5));
        assert_eq!(config.weights(), ServiceWeights { haircut: 80, wash_hair: 10, shave: 10 });
        assert_eq!(config.time_unit, Duration::from_millis(1));
    }

    #[test]
    fn help_wins_over_everything_else() {
        assert_eq!(ShopConfig::from_args(["-b", "3", "-h"]), Ok(Command::Help));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(ShopConfig::from_args(["-x"]), Err(ConfigError::UnknownOption("-x".into())));
        assert_eq!(ShopConfig::from_args(["-b"]), Err(ConfigError::MissingValue("-b".into())));
        assert!(matches!(ShopConfig::from_args(["-t", "1,2"]), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(ShopConfig::from_args(["-b", "0"]), Err(ConfigError::InvalidCount { .. })));
        assert!(matches!(ShopConfig::from_args(["-3", "5,2"]), Err(ConfigError::InvalidInterval { .. })));
        assert!(matches!(ShopConfig::from_args(["-p", "101,0,0"]), Err(ConfigError::InvalidProbability { .. })));
        assert!(matches!(ShopConfig::from_args(["-2", "2,3"]), Err(ConfigError::InvalidBenches { .. })));
    }

    #[test]
    fn units_scale_with_time_unit() {
        let config = ShopConfig { time_unit: Duration::from_millis(10), ..ShopConfig::default() };
        assert_eq!(config.units(7), Duration::from_millis(70));
    }
}
