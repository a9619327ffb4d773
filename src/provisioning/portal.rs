/// Paths operating systems fetch to detect a captive portal. All of them get
/// the landing page so the setup screen pops up on its own.
pub const CAPTIVE_PROBE_PATHS: [&str; 5] = [
    "/generate_204",
    "/gen_204",
    "/hotspot-detect.html",
    "/library/test/success.html",
    "/fwlink",
];

pub fn is_captive_probe(path: &str) -> bool {
    CAPTIVE_PROBE_PATHS.contains(&path)
}

pub const LANDING_PAGE: &str = concat!(
    "<!doctype html><html><head><meta charset='utf-8'/>",
    "<meta name='viewport' content='width=device-width,initial-scale=1'/>",
    "<title>RC car network setup</title></head><body>",
    "<h2>Network setup</h2>",
    "<p><button onclick='scan()'>Scan</button> <span id='st'></span></p>",
    "<p><select id='ssid'></select></p>",
    "<p><input id='pass' type='password' placeholder='password (empty if open)'/></p>",
    "<p><button onclick='save()'>Save and restart</button> ",
    "<button onclick='forget()'>Forget network</button></p>",
    "<pre id='out'></pre><script>",
    "const $=i=>document.getElementById(i);",
    "async function scan(){$('st').textContent='scanning';",
    "const j=await (await fetch('/api/scan')).json();$('ssid').innerHTML='';",
    "for(const ap of j.aps){const o=document.createElement('option');",
    "o.value=ap.ssid;o.textContent=ap.ssid+' ('+ap.rssi+' dBm)';$('ssid').appendChild(o);}",
    "$('st').textContent=j.aps.length+' found';}",
    "async function save(){const body=new URLSearchParams({ssid:$('ssid').value,pass:$('pass').value});",
    "$('out').textContent=await (await fetch('/api/save',{method:'POST',body})).text();}",
    "async function forget(){",
    "$('out').textContent=await (await fetch('/api/forget',{method:'POST'})).text();}",
    "scan();</script></body></html>",
);
