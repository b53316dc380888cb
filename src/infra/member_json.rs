use crate::domain::member::{Member, MemberError, MemberService};
use async_trait::async_trait;
use base64::{engine, Engine};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::{fs, path::Path};

/// A [`MemberService`] that gets members from a JSON file.
#[derive(Debug)]
pub struct JsonMemberService {
    members: HashMap<String, Member>,
}

#[derive(Deserialize, Clone, Debug)]
struct MemberJsonObj {
    id: i64,
    username: String,
    name: Option<String>,
    authorities: Option<Vec<String>>,
}

impl JsonMemberService {
    pub fn from_json(json: &str) -> Result<JsonMemberService, String> {
        let v: Vec<MemberJsonObj> = serde_json::from_str(json).map_err(|e| format!("{:?}", e))?;
        let mut members = HashMap::with_capacity(v.len());
        for m in v {
            if m.username.is_empty() {
                return Err(format!("member with id {} has an empty username", m.id));
            }
            let name = m.name.unwrap_or_else(|| m.username.clone());
            let member = Member::new(m.id, m.username, name).with_authorities(m.authorities.unwrap_or_default());
            if let Some(existing) = members.insert(member.username.clone(), member) {
                return Err(format!("duplicate username {:?}", existing.username));
            }
        }
        Ok(JsonMemberService { members })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<JsonMemberService, String> {
        let path = path.as_ref();
        let json = load_member_file(path).map_err(|e| format!("could not load member file '{}': {}", path.display(), e))?;
        JsonMemberService::from_json(&json)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[async_trait]
impl MemberService for JsonMemberService {
    async fn find_by_username(&self, username: &str) -> Result<Member, MemberError> {
        self.members.get(username).cloned().ok_or_else(|| MemberError::not_found(username))
    }
}

fn load_member_file(path: &Path) -> Result<String, Box<dyn std::error::Error + Send + Sync + 'static>> {
    let mut f = fs::File::open(path)?;

    // The member file can be plaintext, gzipped, or gzipped+base64-encoded
    // The gzip-base64 format is useful for overcoming configmap size limits in Kubernetes
    let mut magic: [u8; 4] = [0; 4];
    let n = f.read(&mut magic[..])?;
    let is_gz = n > 2 && magic[0] == 0x1F && magic[1] == 0x8B && magic[2] == 0x8;
    // the 3 magic bytes translate to "H4sI" in base64
    let is_base64gz = n > 3 && &magic == b"H4sI";

    f.rewind()?;
    let mut raw = Vec::new();
    f.read_to_end(&mut raw)?;
    if !(is_gz || is_base64gz) {
        return Ok(String::from_utf8(raw)?);
    }

    let gzdata = if is_base64gz {
        raw.retain(|&x| x != b'\n' && x != b'\r');
        engine::general_purpose::STANDARD.decode(raw)?
    } else {
        raw
    };
    let mut s = String::new();
    GzDecoder::new(&gzdata[..]).read_to_string(&mut s)?;
    Ok(s)
}
