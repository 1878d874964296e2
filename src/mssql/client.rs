use tiberius::{Client, Config, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

/// Type alias for SQL Server client
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Open a TCP stream and log in.
///
/// Named instances are resolved through the SQL Browser service. A routing
/// answer from the server (Azure gateways) is followed once.
///
/// # Errors
/// Returns the tiberius error if the stream cannot be opened or login fails.
pub async fn create_mssql_client(
    config: Config,
    named_instance: bool,
) -> tiberius::Result<MssqlClient> {
    let tcp = if named_instance {
        TcpStream::connect_named(&config).await?
    } else {
        TcpStream::connect(config.get_addr()).await?
    };
    tcp.set_nodelay(true)?;

    match Client::connect(config.clone(), tcp.compat_write()).await {
        Err(tiberius::error::Error::Routing { host, port }) => {
            debug!(%host, port, "sql server redirected the connection");
            let mut config = config;
            config.host(&host);
            config.port(port);
            let tcp = TcpStream::connect(config.get_addr()).await?;
            tcp.set_nodelay(true)?;
            Client::connect(config, tcp.compat_write()).await
        }
        result => result,
    }
}
