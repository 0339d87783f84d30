use crate::git::ObjectId;

use super::pktline::{Pkt, PktEncoder, PktScanner, WireError};

/// The two smart-HTTP services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    UploadPack,
    ReceivePack,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::UploadPack => "git-upload-pack",
            Service::ReceivePack => "git-receive-pack",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "git-upload-pack" => Some(Service::UploadPack),
            "git-receive-pack" => Some(Service::ReceivePack),
            _ => None,
        }
    }

    /// Capabilities advertised on the first ref line.
    pub fn capabilities(&self) -> &'static str {
        match self {
            Service::UploadPack => "",
            Service::ReceivePack => "report-status delete-refs",
        }
    }
}

/// A client's fetch negotiation: what it wants, what it already has.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadPackRequest {
    pub wants: Vec<ObjectId>,
    pub haves: Vec<ObjectId>,
}

impl UploadPackRequest {
    pub fn decode(body: &[u8]) -> Result<Self, WireError> {
        let mut request = UploadPackRequest::default();
        let mut scanner = PktScanner::new(body);

        while let Some(pkt) = scanner.next()? {
            let Pkt::Data(payload) = pkt else { continue };
            let line = std::str::from_utf8(payload)
                .map_err(|_| WireError::Malformed("request line is not utf-8".to_string()))?
                .trim_end_matches('\n');

            if let Some(rest) = line.strip_prefix("want ") {
                // the first want may carry a capability list after the hex
                let hex = rest.split(' ').next().unwrap_or(rest);
                request.wants.push(parse_id(hex)?);
            } else if let Some(hex) = line.strip_prefix("have ") {
                request.haves.push(parse_id(hex)?);
            } else if line == "done" {
                break;
            } else {
                return Err(WireError::Malformed(format!(
                    "unexpected upload-pack line: {:?}",
                    line
                )));
            }
        }

        if request.wants.is_empty() {
            return Err(WireError::Malformed("upload-pack request without wants".to_string()));
        }
        Ok(request)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = PktEncoder::new();
        for want in &self.wants {
            enc.write(format!("want {}\n", want));
        }
        enc.flush_pkt();
        for have in &self.haves {
            enc.write(format!("have {}\n", have));
        }
        enc.write("done\n");
        enc.into_bytes()
    }
}

/// One requested ref update: `old` is the expected current value (zero for
/// create), `new` the desired one (zero for delete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    pub old: ObjectId,
    pub new: ObjectId,
    pub name: String,
}

/// A client's push: ref update commands plus the pack carrying any new
/// objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceivePackRequest {
    pub updates: Vec<RefUpdate>,
    pub pack: Vec<u8>,
}

impl ReceivePackRequest {
    pub fn decode(body: &[u8]) -> Result<Self, WireError> {
        let mut request = ReceivePackRequest::default();
        let mut scanner = PktScanner::new(body);

        loop {
            match scanner.next()? {
                None | Some(Pkt::Flush) => break,
                Some(Pkt::Data(payload)) => {
                    let line = std::str::from_utf8(payload)
                        .map_err(|_| WireError::Malformed("command line is not utf-8".to_string()))?
                        .trim_end_matches('\n');
                    // the first command may carry capabilities after a NUL
                    let line = line.split('\0').next().unwrap_or(line);

                    let mut parts = line.splitn(3, ' ');
                    let (old, new, name) = (parts.next(), parts.next(), parts.next());
                    let (Some(old), Some(new), Some(name)) = (old, new, name) else {
                        return Err(WireError::Malformed(format!(
                            "malformed update command: {:?}",
                            line
                        )));
                    };
                    request.updates.push(RefUpdate {
                        old: parse_id(old)?,
                        new: parse_id(new)?,
                        name: name.to_string(),
                    });
                }
            }
        }

        request.pack = scanner.remainder().to_vec();
        Ok(request)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut enc = PktEncoder::new();
        for update in &self.updates {
            enc.write(format!("{} {} {}\n", update.old, update.new, update.name));
        }
        enc.flush_pkt();
        enc.write_raw(&self.pack);
        enc.into_bytes()
    }
}

/// Per-ref outcome of a push. `error` is `None` on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefResult {
    pub name: String,
    pub error: Option<String>,
}

/// The report-status body a push gets back. A report existing at all means
/// unpacking succeeded; unpack failures abort the request instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportStatus {
    pub results: Vec<RefResult>,
}

impl ReportStatus {
    pub fn encode(&self) -> Vec<u8> {
        let mut enc = PktEncoder::new();
        enc.write("unpack ok\n");
        for result in &self.results {
            match &result.error {
                None => enc.write(format!("ok {}\n", result.name)),
                Some(reason) => enc.write(format!("ng {} {}\n", result.name, reason)),
            }
        }
        enc.flush_pkt();
        enc.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self, WireError> {
        let mut report = ReportStatus::default();
        let mut scanner = PktScanner::new(body);

        while let Some(pkt) = scanner.next()? {
            let Pkt::Data(payload) = pkt else { continue };
            let line = std::str::from_utf8(payload)
                .map_err(|_| WireError::Malformed("status line is not utf-8".to_string()))?
                .trim_end_matches('\n');

            if line.starts_with("unpack ") {
                continue;
            } else if let Some(name) = line.strip_prefix("ok ") {
                report.results.push(RefResult {
                    name: name.to_string(),
                    error: None,
                });
            } else if let Some(rest) = line.strip_prefix("ng ") {
                let (name, reason) = rest.split_once(' ').unwrap_or((rest, "failed"));
                report.results.push(RefResult {
                    name: name.to_string(),
                    error: Some(reason.to_string()),
                });
            }
        }

        Ok(report)
    }
}

/// Encode a reference advertisement for a service: the `# service=` header,
/// then each ref line, capabilities riding after a NUL on the first.
pub fn encode_advertisement(service: Service, refs: &[(String, ObjectId)]) -> Vec<u8> {
    let caps = service.capabilities();
    let mut enc = PktEncoder::new();
    enc.write(format!("# service={}\n", service.name()));
    enc.flush_pkt();

    if refs.is_empty() {
        // no refs yet; the capability list still has to travel somewhere
        enc.write(format!("{} capabilities^{{}}\0{}\n", ObjectId::ZERO, caps));
    } else {
        for (i, (name, id)) in refs.iter().enumerate() {
            if i == 0 {
                enc.write(format!("{} {}\0{}\n", id, name, caps));
            } else {
                enc.write(format!("{} {}\n", id, name));
            }
        }
    }

    enc.flush_pkt();
    enc.into_bytes()
}

/// Parse an advertisement back into `(name, id)` pairs, dropping the
/// header, capabilities, and the empty-repository sentinel.
pub fn decode_advertisement(body: &[u8]) -> Result<Vec<(String, ObjectId)>, WireError> {
    let mut refs = Vec::new();
    let mut scanner = PktScanner::new(body);

    while let Some(pkt) = scanner.next()? {
        let Pkt::Data(payload) = pkt else { continue };
        let line = std::str::from_utf8(payload)
            .map_err(|_| WireError::Malformed("advertisement line is not utf-8".to_string()))?
            .trim_end_matches('\n');
        if line.starts_with("# service=") {
            continue;
        }
        let line = line.split('\0').next().unwrap_or(line);
        let Some((hex, name)) = line.split_once(' ') else {
            continue;
        };
        if name == "capabilities^{}" {
            continue;
        }
        refs.push((name.to_string(), parse_id(hex)?));
    }

    Ok(refs)
}

fn parse_id(hex: &str) -> Result<ObjectId, WireError> {
    hex.parse()
        .map_err(|_| WireError::Malformed(format!("invalid object id: {:?}", hex)))
}
