//! Connection registry, event dispatcher and public client API.

use core::fmt;
use core::net::{Ipv4Addr, SocketAddrV4};

use heapless::{FnvIndexMap, String};

use super::client::{Client, State};
use super::long_poll::{CloseAction, CompleteAction};
use super::{
    BodyRead, ClientOptions, ConnectionMode, DEFAULT_MAX_CLIENTS, Events, Header, HttpError,
    LongPollMode, MAX_URI_LEN, MultipartChunk, UriKey, Wakeup, WriteProgress, request,
};
use crate::network::{Connect, Resolve, SocketEvents};

/// Owns every logical HTTP connection and the network stack they run on.
///
/// All API calls and stack notifications go through the registry. Callbacks are
/// invoked from inside those calls.
///
/// `CAP` is the maximum number of simultaneous connections and must be a power
/// of two.
pub struct Registry<'a, N, const CAP: usize = DEFAULT_MAX_CLIENTS>
where
    N: Connect + Resolve,
{
    clients: FnvIndexMap<u16, Client<'a, N::Connection>, CAP>,
    network: N,
    options: ClientOptions,
    next_id: u16,
}

impl<N, const CAP: usize> fmt::Debug for Registry<'_, N, CAP>
where
    N: Connect + Resolve,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("clients", &self.clients)
            .field("options", &self.options)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl<'a, N, const CAP: usize> Registry<'a, N, CAP>
where
    N: Connect + Resolve,
{
    /// A registry with default [`ClientOptions`].
    pub fn new(network: N) -> Self {
        Self::with_options(network, ClientOptions::default())
    }

    /// A registry using `options` for every request it builds.
    pub fn with_options(network: N, options: ClientOptions) -> Self {
        Self {
            clients: FnvIndexMap::new(),
            network,
            options,
            next_id: 0,
        }
    }

    /// Options used when building requests.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The network stack.
    pub fn network(&self) -> &N {
        &self.network
    }

    /// The network stack, mutably.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns `true` when no connection is open.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// The client behind `conn`.
    pub fn client(&self, conn: u16) -> Result<&Client<'a, N::Connection>, HttpError> {
        self.clients.get(&conn).ok_or(HttpError::NotFound)
    }

    fn client_mut(&mut self, conn: u16) -> Result<&mut Client<'a, N::Connection>, HttpError> {
        self.clients.get_mut(&conn).ok_or(HttpError::NotFound)
    }

    /// Opens a logical connection to `uri` and returns its ID.
    ///
    /// Host names are handed to the resolver; the connection proceeds once the
    /// stack calls [`Registry::on_dns_resolved`]. An IPv4 literal host is
    /// connected to right away.
    ///
    /// # Errors
    ///
    /// [`HttpError::InvalidUri`] or [`HttpError::OutOfMemory`] from URI parsing,
    /// [`HttpError::OutOfMemory`] when the registry is full and
    /// [`HttpError::Io`] when the resolver refuses the query.
    pub fn open(&mut self, uri: &str, on_event: Wakeup) -> Result<u16, HttpError> {
        self.open_as(None, uri, on_event)
    }

    fn open_as(&mut self, id: Option<u16>, uri: &str, on_event: Wakeup) -> Result<u16, HttpError> {
        let key = UriKey::parse(uri)?;
        if id.is_some_and(|id| self.clients.contains_key(&id)) {
            return Err(HttpError::Exists);
        }
        if self.clients.len() == CAP {
            warn!("registry full");
            return Err(HttpError::OutOfMemory);
        }
        let id = match id {
            Some(id) => id,
            None => self.allocate_id(),
        };
        let literal = key.host.parse::<Ipv4Addr>().ok();
        self.clients
            .insert(id, Client::new(id, key, on_event))
            .map_err(|_| HttpError::OutOfMemory)?;
        debug!("conn {} opened", id);

        match literal {
            Some(ip) => {
                // A failed connect has already been reported as `Events::ERROR`.
                if self.on_dns_resolved(id, Some(ip)).is_err() {
                    debug!("conn {} left unconnected", id);
                }
            }
            None => {
                let resolved = match self.clients.get(&id) {
                    Some(client) => self.network.resolve(&client.uri.host, id),
                    None => return Err(HttpError::NotFound),
                };
                if resolved.is_err() {
                    warn!("conn {} resolver refused the query", id);
                    self.clients.remove(&id);
                    return Err(HttpError::Io);
                }
            }
        }
        Ok(id)
    }

    fn allocate_id(&mut self) -> u16 {
        loop {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            if !self.clients.contains_key(&id) {
                return id;
            }
        }
    }

    /// Closes `conn`: the socket is closed and everything the client holds is
    /// released. Caller-owned request data is left untouched.
    pub fn close(&mut self, conn: u16) -> Result<(), HttpError> {
        let mut client = self.clients.remove(&conn).ok_or(HttpError::NotFound)?;
        client.close_socket();
        debug!("conn {} closed", conn);
        Ok(())
    }

    /// Current state of `conn`.
    pub fn state(&self, conn: u16) -> Result<State, HttpError> {
        Ok(self.client(conn)?.state)
    }

    fn send(
        &mut self,
        conn: u16,
        build: impl FnOnce(&UriKey, &ClientOptions) -> Result<super::PendingRequest<'a>, HttpError>,
    ) -> Result<(), HttpError> {
        let client = self.clients.get_mut(&conn).ok_or(HttpError::NotFound)?;
        if client.state != State::Idle {
            return Err(HttpError::ConnectionBusy);
        }
        let request = build(&client.uri, &self.options)?;
        client.start_request(request)
    }

    /// Sends a GET for the URI `conn` was opened with.
    pub fn send_get(&mut self, conn: u16, mode: ConnectionMode) -> Result<(), HttpError> {
        self.send(conn, |uri, opts| request::get(uri, opts, mode))
    }

    /// Sends a DELETE for the URI `conn` was opened with.
    pub fn send_delete(&mut self, conn: u16, mode: ConnectionMode) -> Result<(), HttpError> {
        self.send(conn, |uri, opts| request::delete(uri, opts, mode))
    }

    /// Sends a form POST carrying `body`.
    ///
    /// `body` is written straight from the caller's memory and must stay
    /// untouched until [`Events::WRITE_SUCCESS`] or [`Events::WRITE_FAILED`].
    /// `content_type` and `cache_control` override the configured defaults.
    pub fn send_post(
        &mut self,
        conn: u16,
        body: &'a [u8],
        mode: ConnectionMode,
        content_type: Option<&str>,
        cache_control: Option<&str>,
    ) -> Result<(), HttpError> {
        self.send(conn, |uri, opts| {
            request::post(uri, opts, mode, body, content_type, cache_control)
        })
    }

    /// Sends a multipart POST built from `chunks`.
    pub fn send_post_multipart(
        &mut self,
        conn: u16,
        chunks: &[MultipartChunk<'a>],
        mode: ConnectionMode,
    ) -> Result<(), HttpError> {
        self.send(conn, |uri, opts| request::post_multipart(uri, opts, mode, chunks))
    }

    /// Sends a caller-built request verbatim.
    pub fn send_raw(&mut self, conn: u16, raw: &'a [u8]) -> Result<(), HttpError> {
        self.send(conn, |_, _| request::raw(raw))
    }

    /// Bytes of the pending request written so far, or `None` when nothing is
    /// being written.
    pub fn write_progress(&self, conn: u16) -> Result<Option<WriteProgress>, HttpError> {
        Ok(self.client(conn)?.pending.as_ref().map(|p| p.progress()))
    }

    /// Header of the current or last response of `conn`.
    pub fn read_header(&self, conn: u16) -> Result<Option<&Header>, HttpError> {
        Ok(self.client(conn)?.header.as_ref())
    }

    /// URI `conn` was opened with.
    pub fn read_uri(&self, conn: u16) -> Result<&UriKey, HttpError> {
        Ok(&self.client(conn)?.uri)
    }

    /// Copies response body bytes of `conn` into `buf`.
    ///
    /// The call after the last body byte was delivered returns
    /// `BodyRead { len: 0, done: true }` and leaves the client idle. Under
    /// keep-alive long polling it also sends the next GET.
    ///
    /// # Errors
    ///
    /// [`HttpError::ConnectionBusy`] while the request is written or the header
    /// read, [`HttpError::InvalidArgument`] when idle,
    /// [`HttpError::MalformedResponse`] for bad chunk framing and
    /// [`HttpError::Io`] when the socket fails before any byte was read.
    pub fn read_body(&mut self, conn: u16, buf: &mut [u8]) -> Result<BodyRead, HttpError> {
        let read = self.client_mut(conn)?.read_body(buf)?;
        if read.done {
            self.reissue_if_polling(conn);
        }
        Ok(read)
    }

    fn reissue_if_polling(&mut self, conn: u16) {
        let Ok(client) = self.client(conn) else {
            return;
        };
        let mode = client.long_poll;
        if mode.on_body_complete() != CompleteAction::Reissue {
            return;
        }
        let Some(connection) = mode.connection_mode() else {
            return;
        };
        trace!("conn {} reissuing long-poll GET", conn);
        if let Err(e) = self.send_get(conn, connection) {
            if let Ok(client) = self.client_mut(conn) {
                client.fail(e);
            }
        }
    }

    /// Sends a GET and keeps polling: after every response (keep-alive) or
    /// every reconnect (close).
    pub fn long_poll_send_get(&mut self, conn: u16, mode: ConnectionMode) -> Result<(), HttpError> {
        self.client_mut(conn)?.long_poll = LongPollMode::from(mode);
        self.send_get(conn, mode)
    }

    /// Stops long polling and closes `conn`.
    pub fn long_poll_cancel(&mut self, conn: u16) -> Result<(), HttpError> {
        self.client_mut(conn)?.long_poll = LongPollMode::Off;
        self.close(conn)
    }

    /// Dispatches socket events for `conn`.
    ///
    /// Events are handled in the order connected, error, close, writable,
    /// readable. When readable and close arrive together the readable data is
    /// handled first. A header parse failure is reported to the callback as
    /// [`Events::ERROR`] and returned.
    ///
    /// A close in the middle of a body leaves the client in its body state
    /// (unless long polling) so the bytes already buffered can still be drained
    /// with [`Registry::read_body`].
    pub fn on_socket_event(&mut self, conn: u16, events: SocketEvents) -> Result<(), HttpError> {
        let client = self.client_mut(conn)?;
        trace!("conn {} socket events {:?}", conn, events);

        if events.contains(SocketEvents::CONNECTED) {
            client.wake(Events::CONNECTED);
        }

        if events.contains(SocketEvents::ERROR) {
            let mut ev = Events::ERROR;
            if client.abort_request() {
                ev |= Events::WRITE_FAILED;
            }
            client.go_idle();
            client.wake(ev);
        }

        if events.intersects(SocketEvents::CLOSE | SocketEvents::FIN) {
            let parsed = if events.contains(SocketEvents::READABLE) {
                client.handle_readable()
            } else {
                Ok(())
            };
            let mut ev = Events::CLOSE;
            if client.abort_request() {
                ev |= Events::WRITE_FAILED;
            }
            let action = client.long_poll.on_close();
            if action == CloseAction::Reopen || !client.state.is_body() {
                client.go_idle();
            }
            match action {
                CloseAction::Surface => client.wake(ev),
                CloseAction::Reopen => self.reopen(conn)?,
            }
            return parsed;
        }

        if events.contains(SocketEvents::WRITABLE) && client.state == State::WritingRequest {
            client.flush_request();
        }

        if events.contains(SocketEvents::READABLE) {
            client.handle_readable()?;
        }
        Ok(())
    }

    fn reopen(&mut self, conn: u16) -> Result<(), HttpError> {
        let client = self.client(conn)?;
        let raw: String<MAX_URI_LEN> = client.uri.raw.clone();
        let on_event = client.on_event;
        let mode = client.long_poll.connection_mode();
        debug!("conn {} reopening for long poll", conn);

        self.close(conn)?;
        if let Err(e) = self.open_as(Some(conn), &raw, on_event) {
            warn!("conn {} reopen failed: {}", conn, e);
            on_event(conn, Events::ERROR | Events::CLOSE);
            return Err(e);
        }
        match mode {
            Some(mode) => self.long_poll_send_get(conn, mode),
            None => Ok(()),
        }
    }

    /// Delivers the resolver's answer for `conn`.
    ///
    /// On success the callback gets [`Events::DNS_RESOLVED`] and a connection to
    /// the resolved address is started. A failed lookup reports
    /// [`Events::ERROR`] and closes the client.
    pub fn on_dns_resolved(&mut self, conn: u16, ip: Option<Ipv4Addr>) -> Result<(), HttpError> {
        let client = self.clients.get_mut(&conn).ok_or(HttpError::NotFound)?;
        let Some(ip) = ip else {
            warn!("conn {} host not found", conn);
            client.wake(Events::ERROR);
            return self.close(conn);
        };

        client.wake(Events::DNS_RESOLVED);
        let remote = SocketAddrV4::new(ip, client.uri.port);
        match self.network.connect(remote) {
            Ok(socket) => {
                client.close_socket();
                client.socket = Some(socket);
                Ok(())
            }
            Err(_) => {
                warn!("conn {} connect failed", conn);
                client.wake(Events::ERROR);
                Err(HttpError::Io)
            }
        }
    }

    /// Finds the connection whose socket satisfies `pred`.
    pub fn connection_id_of(&self, pred: impl Fn(&N::Connection) -> bool) -> Option<u16> {
        self.clients
            .iter()
            .find(|(_, client)| client.socket.as_ref().is_some_and(&pred))
            .map(|(id, _)| *id)
    }
}
