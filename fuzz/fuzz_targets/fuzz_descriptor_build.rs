#![no_main]

use clickhouse_harness::{build_descriptor, ClientConfig, Descriptor};
use libfuzzer_sys::arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;

#[derive(Debug)]
struct ConfigInput {
    servers: Vec<String>,
    username: String,
    password: String,
    options: Vec<String>,
}

impl<'a> Arbitrary<'a> for ConfigInput {
    fn arbitrary(u: &mut Unstructured<'a>) -> libfuzzer_sys::arbitrary::Result<Self> {
        Ok(Self {
            servers: u.arbitrary()?,
            username: u.arbitrary()?,
            password: u.arbitrary()?,
            options: u.arbitrary()?,
        })
    }
}

fn plain(s: &str) -> bool {
    !s.is_empty() && !s.contains(['&', '?', '=', ','])
}

fuzz_target!(|input: ConfigInput| {
    let config = ClientConfig {
        servers: input.servers,
        username: input.username,
        password: input.password,
        options: input.options,
    };

    let Ok(descriptor) = build_descriptor(&config) else {
        assert!(config.servers.is_empty());
        return;
    };

    // values are not escaped, so only plain ones survive a parse unchanged
    let round_trips = config.servers.iter().all(|s| plain(s))
        && plain(&config.username)
        && plain(&config.password)
        && config.options.iter().all(|o| !o.starts_with("alt_hosts"));

    if round_trips {
        let parsed = Descriptor::parse(&descriptor).expect("built descriptor parses");
        assert_eq!(parsed.primary, config.servers[0]);
        assert_eq!(parsed.alt_hosts, config.servers[1..]);
        assert_eq!(parsed.option("username"), Some(config.username.as_str()));
        assert_eq!(parsed.option("password"), Some(config.password.as_str()));
    }
});
