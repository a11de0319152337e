use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("buffer: short")]
    ErrBufferShort,
    /// The number of bytes written does not match `marshal_size()`.
    #[error("marshal size mismatch: expected {0}, wrote {1}")]
    WrongMarshalSize(usize, usize),

    //RTCP errors
    /// Too many reports.
    #[error("rtcp: too many reports")]
    TooManyReports,
    /// Too many chunks.
    #[error("rtcp: too many chunks")]
    TooManyChunks,
    /// Too many sources.
    #[error("rtcp: too many sources")]
    TooManySources,
    /// Packet received is too short.
    #[error("rtcp: packet too short to be read")]
    PacketTooShort,
    /// Buffer is too short.
    #[error("rtcp: buffer too short to be written")]
    BufferTooShort,
    /// A sub-packet declares more bytes than the compound packet holds.
    #[error("rtcp: declared length {0} exceeds remaining {1} bytes")]
    PacketLengthExceedsBuffer(usize, usize),
    /// Wrong packet type.
    #[error("rtcp: wrong packet type")]
    WrongType,
    /// SDES received is too long.
    #[error("rtcp: SDES must be < 255 octets long")]
    SdesTextTooLong,
    /// Reason is too long.
    #[error("rtcp: reason must be < 255 octets long")]
    ReasonTooLong,
    /// Invalid packet version.
    #[error("invalid packet version")]
    BadVersion,
    /// Invalid padding value.
    #[error("invalid padding value")]
    WrongPadding,
    /// Wrong feedback message type.
    #[error("rtcp: wrong feedback message type {0}")]
    WrongFeedbackType(u8),
    /// Count field does not fit in 5 bits.
    #[error("rtcp: invalid header")]
    InvalidHeader,
    /// Missing REMB identifier.
    #[error("rtcp: missing REMB identifier")]
    MissingRembIdentifier,
    /// SSRC number and length mismatches.
    #[error("rtcp: SSRC num and length do not match")]
    SsrcNumAndLengthMismatch,
    #[error("rtcp: invalid bitrate")]
    InvalidBitrate,
    #[error("rtcp: picture loss indication must not carry a body")]
    PictureLossWithBody,
    /// Invalid total lost count.
    #[error("rtcp: invalid total lost count")]
    InvalidTotalLost,
    /// A field value does not fit its wire width.
    #[error("rtcp: {0} out of range")]
    FieldOutOfRange(&'static str),
    /// A transport-wide feedback declares more chunks or deltas than present.
    #[error("rtcp: transport-wide feedback: not enough data")]
    TransportCcNotEnoughData,

    //RTP errors
    #[error("rtp: header size insufficient")]
    ErrHeaderSizeInsufficient,
    #[error("rtp: header size insufficient for extension")]
    ErrHeaderSizeInsufficientForExtension,
    #[error("rtp: header extension id must be between 1 and 14 for RFC 5285 one byte extensions")]
    ErrRfc8285oneByteHeaderIdrange,
    #[error("rtp: header extension payload must be 16bytes or less for RFC 5285 one byte extensions")]
    ErrRfc8285oneByteHeaderSize,
    #[error("rtp: header extension id must be between 1 and 255 for RFC 5285 two byte extensions")]
    ErrRfc8285twoByteHeaderIdrange,
    #[error("rtp: header extension payload must be 255bytes or less for RFC 5285 two byte extensions")]
    ErrRfc8285twoByteHeaderSize,
    #[error("rtp: payload too short to carry an original sequence number")]
    ErrRtxPayloadTooShort,

    //SRTP errors
    #[error("srtp: unknown cipher suite {0}")]
    ErrNoSuchSrtpProfile(String),
    #[error("srtp: key size {1} doesn't match the selected profile (required {0})")]
    SrtpKeyLength(usize, usize),
    #[error("srtp: index_over_kdr > 0 is not supported yet")]
    UnsupportedIndexOverKdr,
    #[error("srtp: too short SRTP packet: only {0} bytes, expected > {1} bytes")]
    SrtpTooSmall(usize, usize),
    #[error("srtp: too short SRTCP packet: only {0} bytes, expected > {1} bytes")]
    SrtcpTooSmall(usize, usize),
    #[error("srtp: failed to verify rtp auth tag")]
    RtpFailedToVerifyAuthTag,
    #[error("srtp: failed to verify rtcp auth tag")]
    RtcpFailedToVerifyAuthTag,
    #[error("srtp ssrc={0} index={1}: duplicated")]
    SrtpSsrcDuplicated(u32, u64),
    #[error("srtcp ssrc={0} index={1}: duplicated")]
    SrtcpSsrcDuplicated(u32, u32),

    //Transport errors
    #[error("transport: unknown payload type {0}")]
    UnknownPayloadType(u8),
    #[error("transport: unknown ssrc {0}")]
    UnknownSsrc(u32),
    #[error("transport: payload type {1} on ssrc {0} is not mapped to {2}")]
    CodecMismatch(u32, u8, &'static str),
    #[error("transport: rtx associated payload type {0} is not configured")]
    RtxAssociatedPayloadType(u8),
    #[error("transport: media ssrc must not be zero")]
    MissingMediaSsrc,
    #[error("transport: ssrc {0} appears twice in one group")]
    DuplicateSsrc(u32),
    #[error("transport: ssrc {0} is already registered by another group")]
    SsrcAlreadyRegistered(u32),
    #[error("transport: packet size {0} exceeds mtu {1}")]
    PacketExceedsMtu(usize, usize),
    #[error("transport: codec {0} has no payload type")]
    UnmappedCodec(String),

    //Configuration errors
    #[error("config: unknown dtls setup {0}")]
    UnknownSetupRole(String),
    #[error("config: holdconn setup has no dtls role")]
    HoldConnSetup,
    #[error("config: unknown hash function {0}")]
    UnknownHashFunction(String),
    #[error("config: invalid fingerprint {0}")]
    InvalidFingerprint(String),
    #[error("config: invalid value {1} for property {0}")]
    InvalidProperty(String, String),
    #[error("config: {0}")]
    ErrConfig(String),

    #[error("dtls: {0}")]
    Dtls(String),

    #[error("{0}")]
    Other(String),
}
