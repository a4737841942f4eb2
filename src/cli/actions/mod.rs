pub mod server;

use secrecy::SecretString;

pub enum Action {
    Server {
        port: u16,
        dsn: String,
        access_id: String,
        secret: SecretString,
    },
}
