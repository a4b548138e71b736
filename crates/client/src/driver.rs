//! One request, one response.
//!
//! The client builds a single detect or replace frame, sends it, and decodes
//! exactly one reply. Any framing or transport failure is a communication
//! error; nothing is retried.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use facewire_protocol::transport::{read_array, read_payload, write_all};
use facewire_protocol::{
    Frame, LENGTH_LEN, OPERATION_LEN, Operation, PREFIX_LEN, decode_length, decode_prefix,
    resolve,
};

use crate::args::ClientArgs;
use crate::error::ClientError;

/// A connection to a face server.
pub struct FaceClient<S> {
    stream: S,
}

impl FaceClient<TcpStream> {
    /// Connects to the server on `localhost:<port>`.
    ///
    /// `port` is a port number or a service name. Every resolved address is
    /// tried in turn.
    pub async fn connect(port: &str) -> Result<Self, ClientError> {
        let connect_err = |e: std::io::Error| {
            debug!(port, "connect failed: {e}");
            ClientError::Connect {
                port: port.to_string(),
            }
        };
        let addrs = resolve("localhost", port).await.map_err(connect_err)?;
        let stream = TcpStream::connect(&addrs[..]).await.map_err(connect_err)?;
        info!(peer = ?stream.peer_addr().ok(), "connected");
        Ok(Self::new(stream))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> FaceClient<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Sends one request frame.
    pub async fn send(&mut self, frame: &Frame) -> Result<(), ClientError> {
        let bytes = frame.encode().map_err(ClientError::communication)?;
        write_all(&mut self.stream, &bytes).await?;
        debug!(operation = %frame.operation, len = bytes.len(), "request sent");
        Ok(())
    }

    /// Reads one response frame.
    pub async fn receive(&mut self) -> Result<Frame, ClientError> {
        let prefix = read_array::<PREFIX_LEN, _>(&mut self.stream).await?;
        decode_prefix(prefix).map_err(ClientError::communication)?;

        let [op] = read_array::<OPERATION_LEN, _>(&mut self.stream).await?;
        let operation = Operation::try_from(op).map_err(ClientError::communication)?;
        if !operation.is_response() {
            return Err(ClientError::communication(format!(
                "unexpected {operation} frame from server"
            )));
        }

        let len = decode_length(read_array::<LENGTH_LEN, _>(&mut self.stream).await?);
        let payload = read_payload(&mut self.stream, len).await?;
        debug!(%operation, len, "response received");

        Ok(Frame {
            operation,
            primary: payload,
            secondary: None,
        })
    }

    /// Sends `frame` and returns the output image, or the server's error text.
    pub async fn request(&mut self, frame: &Frame) -> Result<Vec<u8>, ClientError> {
        self.send(frame).await?;
        let response = self.receive().await?;
        match response.operation {
            Operation::Output => Ok(response.primary),
            _ => Err(ClientError::Server {
                message: response.text(),
            }),
        }
    }
}

/// Runs the whole client: check files, connect, one exchange, write the result.
pub async fn run(args: &ClientArgs) -> Result<(), ClientError> {
    args.check_files()?;
    let mut client = FaceClient::connect(&args.port).await?;
    info!(operation = %args.operation(), "sending request");
    let frame = build_request(args, tokio::io::stdin()).await?;
    let image = client.request(&frame).await?;
    write_output(args.output_file.as_deref(), &image).await
}

/// Builds the request frame, reading the primary image from `stdin` when no
/// file was given.
pub async fn build_request<R: AsyncRead + Unpin>(
    args: &ClientArgs,
    mut stdin: R,
) -> Result<Frame, ClientError> {
    let primary = match &args.detect_file {
        Some(path) => read_file(path).await?,
        None => {
            let mut buf = Vec::new();
            stdin
                .read_to_end(&mut buf)
                .await
                .map_err(ClientError::communication)?;
            buf
        }
    };

    match &args.replace_file {
        Some(path) => Ok(Frame::replace(primary, read_file(path).await?)),
        None => Ok(Frame::detect(primary)),
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ClientError> {
    tokio::fs::read(path)
        .await
        .map_err(|_| ClientError::InputFile {
            path: path.to_path_buf(),
        })
}

/// Writes the result image to `dest`, or to standard output.
pub async fn write_output(dest: Option<&Path>, image: &[u8]) -> Result<(), ClientError> {
    match dest {
        Some(path) => tokio::fs::write(path, image)
            .await
            .map_err(|_| ClientError::OutputFile {
                path: path.to_path_buf(),
            }),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(image)
                .await
                .map_err(ClientError::communication)?;
            stdout.flush().await.map_err(ClientError::communication)
        }
    }
}
