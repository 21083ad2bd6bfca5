//! Top-level event loop.
//!
//! Trivial plumbing, per `spec.md` §2: a single `mio::Poll` instance
//! multiplexes the SDP UDP socket, the TCP listener, and (once connected)
//! the one active peer stream, with a 100 ms tick. Everything else —
//! decoding, dispatch, encoding — runs to completion synchronously inside
//! one readiness event, matching the `select()`-with-`timeval` loop in
//! `original_source/redux.c`.

use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mio::net::{TcpListener, TcpStream, UdpSocket};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{error, info, warn};

use crate::config::StationConfig;
use crate::error::SeccError;
use crate::exi::{self, HandshakeDoc};
use crate::rand_source::SessionRng;
use crate::session::Session;
use crate::v2gtp::{self, PayloadType};

const SDP_TOKEN: Token = Token(0);
const LISTENER_TOKEN: Token = Token(1);
const PEER_TOKEN: Token = Token(2);

const TICK: Duration = Duration::from_millis(100);

/// Per-connection scratch buffer size. Large enough for any ISO 15118-2
/// body this core produces or consumes.
const BUFFER_SIZE: usize = 4096;

/// Bind the SDP UDP socket, join `ff02::1` on the named interface's scope,
/// and wrap it as a non-blocking `mio::net::UdpSocket`.
///
/// `mio`'s `UdpSocket` exposes no multicast-join API, so group membership
/// and `SO_REUSEADDR` are configured through `socket2::Socket` first; the
/// raw file descriptor is then handed to `mio`.
fn bind_sdp_socket(config: &StationConfig, scope_id: u32) -> Result<UdpSocket, SeccError> {
    let socket = Socket::new(Domain::IPV6, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    let bind_addr: SocketAddr = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, config.sdp_port, 0, scope_id).into();
    socket.bind(&bind_addr.into())?;

    let multicast_group: Ipv6Addr = StationConfig::SDP_MULTICAST_GROUP
        .parse()
        .expect("SDP_MULTICAST_GROUP is a valid literal");
    socket.join_multicast_v6(&multicast_group, scope_id)?;

    Ok(UdpSocket::from_std(socket.into()))
}

/// Bind the TCP listener on the named interface's scope.
fn bind_tcp_listener(config: &StationConfig, scope_id: u32) -> Result<TcpListener, SeccError> {
    let socket = Socket::new(Domain::IPV6, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    let bind_addr: SocketAddr = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, config.tcp_port, 0, scope_id).into();
    socket.bind(&bind_addr.into())?;
    socket.listen(1)?;
    Ok(TcpListener::from_std(socket.into()))
}

/// Runs until `shutdown` is set (normally by a SIGINT handler installed
/// by the caller) or a startup-fatal error occurs.
pub fn run(config: StationConfig, shutdown: Arc<AtomicBool>) -> Result<(), SeccError> {
    let link_local = crate::sdp::resolve_link_local_address(&config.interface)
        .ok_or_else(|| SeccError::NoLinkLocalAddress(config.interface.clone()))?;
    let scope_id = interface_index(&config.interface);

    info!(interface = %config.interface, %link_local, "resolved link-local address");

    let mut sdp_socket = bind_sdp_socket(&config, scope_id)?;
    let mut listener = bind_tcp_listener(&config, scope_id)?;
    info!(port = config.sdp_port, "SDP responder bound");
    info!(port = config.tcp_port, "TCP listener bound");

    let mut poll = Poll::new()?;
    poll.registry()
        .register(&mut sdp_socket, SDP_TOKEN, Interest::READABLE)?;
    poll.registry()
        .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

    let mut rng = SessionRng::init()?;
    let mut events = Events::with_capacity(16);

    let mut peer: Option<TcpStream> = None;
    let mut session = Session::new();
    let mut buf = vec![0u8; BUFFER_SIZE];

    while !shutdown.load(Ordering::Relaxed) {
        match poll.poll(&mut events, Some(TICK)) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }

        for event in events.iter() {
            match event.token() {
                SDP_TOKEN => handle_sdp_readable(&mut sdp_socket, &mut buf, link_local, config.tcp_port),
                LISTENER_TOKEN => {
                    if peer.is_some() {
                        // Single-peer invariant: drain and ignore further
                        // accepts while a peer is connected.
                        continue;
                    }
                    match listener.accept() {
                        Ok((mut stream, addr)) => {
                            info!(%addr, "accepted TCP peer");
                            if let Err(e) = poll
                                .registry()
                                .register(&mut stream, PEER_TOKEN, Interest::READABLE)
                            {
                                error!(error = %e, "failed to register peer socket");
                                continue;
                            }
                            peer = Some(stream);
                            session = Session::new();
                        }
                        Err(e) if e.kind() == ErrorKind::WouldBlock => {}
                        Err(e) => error!(error = %e, "accept failed"),
                    }
                }
                PEER_TOKEN => {
                    let should_close = handle_peer_readable(
                        peer.as_mut(),
                        &mut buf,
                        &mut session,
                        &config,
                        &mut rng,
                    );
                    if should_close {
                        if let Some(mut stream) = peer.take() {
                            let _ = poll.registry().deregister(&mut stream);
                        }
                        session = Session::new();
                        info!("peer session closed, listener re-armed");
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn handle_sdp_readable(socket: &mut UdpSocket, buf: &mut [u8], link_local: Ipv6Addr, tcp_port: u16) {
    loop {
        match socket.recv_from(buf) {
            Ok((len, from)) => {
                if let Some(response) = crate::sdp::handle_datagram(&buf[..len], link_local, tcp_port) {
                    match socket.send_to(&response, from) {
                        Ok(_) => info!(%from, "sent SDP discovery response"),
                        Err(e) => warn!(error = %e, "failed to send SDP response"),
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) => {
                warn!(error = %e, "SDP socket read error");
                break;
            }
        }
    }
}

/// Returns `true` if the peer connection should be torn down.
fn handle_peer_readable(
    peer: Option<&mut TcpStream>,
    buf: &mut [u8],
    session: &mut Session,
    config: &StationConfig,
    rng: &mut SessionRng,
) -> bool {
    let Some(stream) = peer else { return false };

    let read_len = match stream.read(buf) {
        Ok(0) => {
            info!("peer EOF");
            return true;
        }
        Ok(n) => n,
        Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
        Err(e) => {
            warn!(error = %e, "peer read error");
            return true;
        }
    };

    match process_frame(buf, read_len, session, config, rng) {
        Ok(Some(total_len)) => {
            if let Err(e) = stream.write_all(&buf[..total_len]) {
                warn!(error = %e, "short write to peer");
                return true;
            }
        }
        Ok(None) => {
            // Frame-ignored: deliberately unhandled body, malformed
            // handshake negotiation, or an EXI decode/encode failure.
            // Session stays open.
        }
        Err(e) => {
            warn!(error = %e, "session-fatal frame error, closing peer");
            return true;
        }
    }

    false
}

/// Decode one V2GTP-framed inbound message out of `buf[..read_len]`,
/// dispatch it through the session engine, and — reusing the same
/// `buf` — encode the reply (if any) back over it, since the inbound
/// document is fully parsed into owned values before any encode writes
/// into the buffer. Returns the total framed length written into `buf`,
/// or `Ok(None)` for "frame-ignored" (log and drop, keep the session
/// open); `Err` means session-fatal.
fn process_frame(
    buf: &mut [u8],
    read_len: usize,
    session: &mut Session,
    config: &StationConfig,
    rng: &mut SessionRng,
) -> Result<Option<usize>, SeccError> {
    let available = read_len.saturating_sub(v2gtp::HEADER_LEN);
    let header = v2gtp::read_header_checked(&buf[..read_len], available)?;

    if session.handshake_pending {
        if header.payload_type != PayloadType::Exi {
            return Err(SeccError::HandshakeExpected);
        }
        let doc = match exi::decode_handshake(&buf[v2gtp::HEADER_LEN..read_len]) {
            Ok(d) => d,
            Err(e) => {
                // There is no wire-level tag distinguishing a handshake
                // document from an ISO body under payload type EXI, so a
                // decode failure here is the only signal that the peer
                // sent an ISO body frame while handshake_pending was
                // still true. spec.md §3: that is a fatal session error,
                // not a frame to silently drop.
                warn!(error = %e, "handshake decode failed while handshake pending");
                return Err(SeccError::HandshakeExpected);
            }
        };
        let req = match doc {
            HandshakeDoc::Req(req) => req,
            HandshakeDoc::Res(_) => {
                warn!("received a handshake response from peer; dropping");
                return Ok(None);
            }
        };
        return match session.handle_handshake(&req, config) {
            Some(res) => Ok(Some(frame_handshake(buf, &res)?)),
            // No compatible protocol: emit no response at all, per spec.
            None => Ok(None),
        };
    }

    let doc = match exi::decode_iso(&buf[v2gtp::HEADER_LEN..read_len]) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "ISO body decode failed");
            return Ok(None);
        }
    };

    match session.handle_iso(&doc, config, rng)? {
        Some(reply) => Ok(Some(frame_iso(buf, &reply)?)),
        None => Ok(None),
    }
}

/// Assemble one outbound handshake message in place, over the same
/// per-connection buffer the inbound frame was read into: reserve the
/// first 8 bytes for the V2GTP header, encode at offset 8, then back-fill
/// the header with the true payload length — a single buffer, a single
/// write. Safe because the inbound document was already fully decoded
/// into owned values before this call.
fn frame_handshake(buf: &mut [u8], doc: &exi::handshake::SupportedAppProtocolRes) -> Result<usize, SeccError> {
    let len = exi::encode_handshake(buf, v2gtp::HEADER_LEN, &HandshakeDoc::Res(doc.clone()))?;
    v2gtp::write_header(buf, len as u32, PayloadType::Exi)?;
    Ok(v2gtp::HEADER_LEN + len)
}

fn frame_iso(buf: &mut [u8], doc: &exi::V2GMessage) -> Result<usize, SeccError> {
    let len = exi::encode_iso(buf, v2gtp::HEADER_LEN, doc)?;
    v2gtp::write_header(buf, len as u32, PayloadType::Exi)?;
    Ok(v2gtp::HEADER_LEN + len)
}

/// Resolve the interface's scope ID for IPv6 multicast/bind purposes.
/// `if-addrs` surfaces addresses but not the kernel interface index, so
/// this one lookup goes straight to libc, matching `if_nametoindex` in
/// `original_source/redux.c`.
fn interface_index(ifname: &str) -> u32 {
    let cname = match std::ffi::CString::new(ifname) {
        Ok(c) => c,
        Err(_) => return 0,
    };
    // SAFETY: `if_nametoindex` only reads the NUL-terminated name we just
    // constructed and returns 0 on failure; no output pointer is written.
    unsafe { libc::if_nametoindex(cname.as_ptr()) }
}
